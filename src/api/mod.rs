// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Platform API Access
//!
//! Every outbound call goes through [`RequestPipeline::send`]:
//!
//! - `casing` - camelCase ⇄ snake_case key conversion
//! - `request` - request builder and decoded response
//! - `transport` - byte-level transport (`reqwest` in production)
//! - `pipeline` - bearer attachment and the refresh-once protocol

pub mod casing;
pub mod pipeline;
pub mod request;
pub mod transport;

pub use pipeline::{AuthFlowState, RefreshFailure, RequestPipeline, UnauthorizedHook, REFRESH_PATH};
pub use request::{ApiRequest, ApiResponse, RequestBody, ResponseBody};
pub use transport::{HttpTransport, Transport, TransportError, WireRequest, WireResponse};

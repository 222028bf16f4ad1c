//! Command dispatch engine.
//!
//! One dispatcher per transport (they may share the anti-flood window,
//! see `DedupScope`). `dispatch` never propagates an error to the
//! transport: every failure path ends in a log line plus an optional
//! canned response, and the connection stays open.

use crate::admin::AdminSet;
use crate::contract::{CommandContract, InvalidReply, command_table};
use crate::dedup::DedupWindow;
use crate::handlers;
use crate::registry::{Broadcaster, ClientConnection};
use smartgate_core::AdminSecret;
use smartgate_device::{DeviceLifecycle, SerialBridge};
use smartgate_protocol::{CommandCode, Request, Response};
use smartgate_store::AnyStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Shared state command handlers operate on.
///
/// Process-wide by design: the device, the store, the bridge, the
/// connection registries, and the admin set are resources shared by
/// every connection on both transports.
pub struct GatewayContext {
    pub lifecycle: Arc<DeviceLifecycle>,
    pub store: AnyStore,
    pub bridge: Arc<SerialBridge>,
    pub broadcaster: Arc<Broadcaster>,
    pub admins: AdminSet,
    pub admin_secret: AdminSecret,
}

/// Code→contract table plus the anti-flood window.
pub struct Dispatcher {
    ctx: Arc<GatewayContext>,
    table: HashMap<CommandCode, CommandContract>,
    dedup: Arc<DedupWindow>,
}

impl Dispatcher {
    /// Build a dispatcher over the shared context. The dedup window is
    /// passed in so the server can share one across transports or give
    /// each transport its own.
    pub fn new(ctx: Arc<GatewayContext>, dedup: Arc<DedupWindow>) -> Self {
        Self {
            ctx,
            table: command_table(),
            dedup,
        }
    }

    /// Shared context, used by transports for registration and cleanup.
    pub fn context(&self) -> &Arc<GatewayContext> {
        &self.ctx
    }

    /// Validate, deduplicate, and execute one request.
    ///
    /// 1. Unknown code: logged, no response, connection stays open.
    /// 2. Anti-flood: identical request from the same sender within the
    ///    window is suppressed; the record refreshes either way.
    /// 3. Contract checks in order (arity, device, admin); the first
    ///    failure answers per the contract's canned reply.
    /// 4. Contract passed: the handler runs with the code stripped and
    ///    sends zero or more responses itself.
    pub async fn dispatch(&self, conn: &ClientConnection, request: Request) {
        let code = match CommandCode::parse(&request.code) {
            Ok(code) => code,
            Err(_) => {
                warn!(code = %request.code, addr = %conn.addr(), "Unknown request code");
                return;
            }
        };

        let Some(contract) = self.table.get(&code) else {
            warn!(%code, "No contract registered for command");
            return;
        };

        if self
            .dedup
            .observe(code, &request.params, conn.addr(), Instant::now())
        {
            debug!(%code, addr = %conn.addr(), "Duplicate request suppressed");
            return;
        }

        let device_available = self.ctx.lifecycle.is_connected().await;
        let is_admin = self.ctx.admins.contains(conn.addr());

        if let Some(violation) = contract.check(request.param_count(), device_available, is_admin)
        {
            if violation.is_expected() {
                info!(%code, addr = %conn.addr(), %violation, "Contract violation");
            } else {
                warn!(%code, addr = %conn.addr(), %violation, "Contract violation");
            }

            match contract.on_violation {
                InvalidReply::Silent => {}
                InvalidReply::ToCaller(value) => {
                    conn.send(Response::new(code.as_str()).field(value));
                }
                InvalidReply::ToAll(value) => {
                    self.ctx
                        .broadcaster
                        .broadcast_all(&Response::new(code.as_str()).field(value));
                }
            }
            return;
        }

        handlers::handle(&self.ctx, conn, code, &request.params).await;
    }
}

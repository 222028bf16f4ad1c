//! Command handlers.
//!
//! Each handler is a simple request/response leaf: the contract has
//! already validated arity, device availability, and privilege, so
//! handlers only perform their operation and answer. Device operations
//! go through the lifecycle accessor, which reports unavailability if
//! the device vanished between the contract check and the call.

use crate::dispatch::GatewayContext;
use crate::registry::ClientConnection;
use smartgate_core::{TagUid, constants::REPLY_EMPTY};
use smartgate_device::Controller;
use smartgate_protocol::{CommandCode, Response};
use smartgate_store::GatewayStore;
use tracing::{info, warn};

/// Route a validated request to its handler.
pub async fn handle(
    ctx: &GatewayContext,
    conn: &ClientConnection,
    code: CommandCode,
    params: &[String],
) {
    match code {
        CommandCode::Initialization => initialization(ctx, conn).await,
        CommandCode::AdminSignIn => admin_sign_in(ctx, conn, params).await,
        CommandCode::AdminSignOut => admin_sign_out(ctx, conn).await,
        CommandCode::StartScan => device_op(ctx, conn, code, async |c| c.start_scan().await).await,
        CommandCode::StopScan => device_op(ctx, conn, code, async |c| c.stop_scan().await).await,
        CommandCode::OpenDoor => device_op(ctx, conn, code, async |c| c.open_door().await).await,
        CommandCode::ReadTemperature => read_temperature(ctx, conn).await,
        CommandCode::AddUser => add_user(ctx, conn, params).await,
        CommandCode::RemoveUser => remove_user(ctx, conn, params).await,
        CommandCode::RewriteTag => rewrite_tag(ctx, conn, params).await,
        CommandCode::EnrollFingerprint => enroll_fingerprint(ctx, conn, params).await,
        CommandCode::SerialBridge => serial_bridge(ctx, conn, params).await,
    }
}

/// `[INITIALIZATION, serial, model, hw, sw]`, registering the serial
/// number on first contact.
async fn initialization(ctx: &GatewayContext, conn: &ClientConnection) {
    let Some(descriptor) = ctx.lifecycle.descriptor().await else {
        conn.send(Response::new(CommandCode::Initialization.as_str()).field(REPLY_EMPTY));
        return;
    };

    match ctx.store.is_device_registered(&descriptor.serial_number).await {
        Ok(false) => {
            if let Err(e) = ctx.store.register_device(&descriptor.serial_number).await {
                warn!(serial = %descriptor.serial_number, error = %e,
                      "Device registration failed");
            } else {
                info!(serial = %descriptor.serial_number, "Device registered");
            }
        }
        Ok(true) => {}
        Err(e) => warn!(error = %e, "Device registration lookup failed"),
    }

    conn.send(
        Response::new(CommandCode::Initialization.as_str())
            .field(&descriptor.serial_number)
            .field(descriptor.model.as_str())
            .field(&descriptor.hardware_version)
            .field(&descriptor.software_version),
    );
}

async fn admin_sign_in(ctx: &GatewayContext, conn: &ClientConnection, params: &[String]) {
    let granted = ctx.admin_secret.matches(&params[0]);
    if granted {
        ctx.admins.sign_in(conn.addr());
    } else {
        info!(addr = %conn.addr(), "Admin sign-in rejected");
    }
    conn.send(Response::boolean(CommandCode::AdminSignIn.as_str(), granted));
}

async fn admin_sign_out(ctx: &GatewayContext, conn: &ClientConnection) {
    let was_admin = ctx.admins.sign_out(conn.addr());
    conn.send(Response::boolean(CommandCode::AdminSignOut.as_str(), was_admin));
}

/// Shared shape for fire-and-acknowledge device operations.
async fn device_op(
    ctx: &GatewayContext,
    conn: &ClientConnection,
    code: CommandCode,
    op: impl AsyncFnOnce(&mut smartgate_device::AnyController) -> smartgate_core::Result<()>,
) {
    let result = ctx.lifecycle.with_controller(op).await;
    if let Err(e) = &result {
        info!(%code, error = %e, "Device operation failed");
    }
    conn.send(Response::boolean(code.as_str(), result.is_ok()));
}

async fn read_temperature(ctx: &GatewayContext, conn: &ClientConnection) {
    match ctx
        .lifecycle
        .with_controller(async |c| c.read_temperature().await)
        .await
    {
        Ok(celsius) => {
            conn.send(
                Response::new(CommandCode::ReadTemperature.as_str())
                    .field(format!("{celsius:.1}")),
            );
        }
        Err(e) => {
            info!(error = %e, "Temperature read failed");
            conn.send(Response::new(CommandCode::ReadTemperature.as_str()).field(REPLY_EMPTY));
        }
    }
}

async fn add_user(ctx: &GatewayContext, conn: &ClientConnection, params: &[String]) {
    let result = ctx.store.upsert_user(&params[0]).await;
    if let Err(e) = &result {
        warn!(user = %params[0], error = %e, "User upsert failed");
    }
    conn.send(Response::boolean(CommandCode::AddUser.as_str(), result.is_ok()));
}

async fn remove_user(ctx: &GatewayContext, conn: &ClientConnection, params: &[String]) {
    let removed = match ctx.store.remove_user(&params[0]).await {
        Ok(removed) => removed,
        Err(e) => {
            warn!(user = %params[0], error = %e, "User removal failed");
            false
        }
    };
    conn.send(Response::boolean(CommandCode::RemoveUser.as_str(), removed));
}

async fn rewrite_tag(ctx: &GatewayContext, conn: &ClientConnection, params: &[String]) {
    let parsed = TagUid::new(&params[0])
        .and_then(|current| TagUid::new(&params[1]).map(|replacement| (current, replacement)));
    let (current, replacement) = match parsed {
        Ok(pair) => pair,
        Err(error) => {
            warn!(%error, "Tag rewrite rejected");
            conn.send(Response::boolean(CommandCode::RewriteTag.as_str(), false));
            return;
        }
    };

    let result = ctx
        .lifecycle
        .with_controller(async |c| c.rewrite_tag(&current, &replacement).await)
        .await;
    if let Err(e) = &result {
        info!(error = %e, "Tag rewrite failed");
    }
    conn.send(Response::boolean(CommandCode::RewriteTag.as_str(), result.is_ok()));
}

async fn enroll_fingerprint(ctx: &GatewayContext, conn: &ClientConnection, params: &[String]) {
    let user = params[0].clone();
    let result = ctx
        .lifecycle
        .with_controller(async |c| c.enroll_fingerprint(&user).await)
        .await;
    if let Err(e) = &result {
        info!(user = %params[0], error = %e, "Fingerprint enrollment failed");
    }
    conn.send(Response::boolean(
        CommandCode::EnrollFingerprint.as_str(),
        result.is_ok(),
    ));
}

/// `SERIAL_BRIDGE on|off`: admin-gated toggle of the external
/// forwarding process.
async fn serial_bridge(ctx: &GatewayContext, conn: &ClientConnection, params: &[String]) {
    let outcome = match params[0].to_ascii_lowercase().as_str() {
        "on" => ctx.bridge.engage(&ctx.lifecycle).await,
        "off" => ctx.bridge.release(&ctx.lifecycle).await,
        other => {
            warn!(toggle = %other, "Serial bridge toggle must be 'on' or 'off'");
            conn.send(Response::boolean(CommandCode::SerialBridge.as_str(), false));
            return;
        }
    };

    if let Err(e) = &outcome {
        info!(error = %e, "Serial bridge toggle refused");
    }
    conn.send(Response::boolean(
        CommandCode::SerialBridge.as_str(),
        outcome.is_ok(),
    ));
}

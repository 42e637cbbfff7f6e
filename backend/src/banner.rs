//! Startup announcement: share URL, QR code and enabled options.

use std::net::IpAddr;

use qrcode::{EcLevel, QrCode, render::unicode};
use tracing::{info, warn};

use crate::config::AppConfig;

/// First non-loopback IPv4 address among the local interfaces.
pub fn local_ip() -> Option<IpAddr> {
    let interfaces = if_addrs::get_if_addrs()
        .inspect_err(|err| warn!(error = %err, "failed to enumerate network interfaces"))
        .ok()?;
    first_lan_ipv4(interfaces.iter().map(|iface| iface.ip()))
}

fn first_lan_ipv4(addrs: impl IntoIterator<Item = IpAddr>) -> Option<IpAddr> {
    addrs
        .into_iter()
        .find(|ip| ip.is_ipv4() && !ip.is_loopback() && !ip.is_unspecified())
}

pub fn share_url(ip: Option<IpAddr>, port: u16) -> String {
    match ip {
        Some(ip) => format!("http://{ip}:{port}"),
        None => format!("http://localhost:{port}"),
    }
}

/// Renders `data` as a QR code using half-block characters, two modules per
/// terminal row.
pub fn terminal_qr(data: &str) -> Result<String, qrcode::types::QrError> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M)?;
    Ok(code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .quiet_zone(true)
        .build())
}

pub fn announce(config: &AppConfig) {
    let url = share_url(local_ip(), config.port);

    if !config.no_qr {
        match terminal_qr(&url) {
            Ok(qr) => println!("{qr}"),
            Err(err) => warn!(error = %err, "failed to render QR code"),
        }
    }

    println!(
        "Server started at {url} sharing directory: {}",
        config.shared_dir.display()
    );
    if config.password_enabled() {
        println!("Password protection enabled");
    }
    if config.verbose {
        println!("Verbose logging enabled");
    }

    info!(
        url = %url,
        shared_dir = %config.shared_dir.display(),
        password = config.password_enabled(),
        "sharing directory"
    );
}

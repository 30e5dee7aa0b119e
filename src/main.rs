// Hide console window in release mode
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

#[cfg(windows)]
fn main() -> anyhow::Result<()> {
    use anyhow::Context;
    use micmute::audio::{ComApartment, DefaultCaptureDevice};
    use micmute::autostart::RunKey;
    use micmute::config::AppPaths;
    use micmute::controller::TrayController;
    use micmute::{logging, platform};
    use tracing::{info, warn};

    let paths = AppPaths::from_current_exe().context("failed to locate executable directory")?;
    if let Err(e) = logging::init(&paths.logs) {
        eprintln!("logging disabled: {e:#}");
    }
    info!(version = env!("CARGO_PKG_VERSION"), "starting");

    // Kept alive for the whole message loop; every mute call runs on this thread.
    let _com = ComApartment::init()
        .inspect_err(|e| warn!(error = %e, "COM initialisation failed"))
        .ok();

    let (events_tx, events_rx) = crossbeam_channel::unbounded();
    let shell = platform::WindowsShell::new(events_tx.clone())?;
    let mut controller = TrayController::start(shell, DefaultCaptureDevice, &paths, events_tx);

    match std::env::current_exe() {
        Ok(exe) => controller.ensure_autostart(&mut RunKey, &exe),
        Err(e) => warn!(error = %e, "cannot resolve executable for startup entry"),
    }

    platform::run(&mut controller, &events_rx)
}

#[cfg(not(windows))]
fn main() -> anyhow::Result<()> {
    anyhow::bail!("micmute only runs on Windows")
}

#![cfg_attr(
    all(target_os = "windows", not(debug_assertions)),
    windows_subsystem = "windows"
)]

#[cfg(target_os = "windows")]
mod windows_app;

#[cfg(target_os = "windows")]
fn main() -> anyhow::Result<()> {
    prompt_builder::logging::init();
    windows_app::run()
}

#[cfg(not(target_os = "windows"))]
fn main() -> anyhow::Result<()> {
    prompt_builder::logging::init();
    let mut server = prompt_builder::startup::start_server()?;
    tracing::info!(
        "open http://127.0.0.1:{}/ in a browser; stop with Ctrl+C",
        server.port()
    );
    server.wait();
    Ok(())
}

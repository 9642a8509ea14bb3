use anyhow::{Context, Result};
use prompt_builder::server::AppServer;
use prompt_builder::startup::start_server;
use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window, WindowId};
use wry::{WebView, WebViewBuilder};

pub fn run() -> Result<()> {
    let server = start_server()?;
    let url = format!("http://127.0.0.1:{}/", server.port());

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let mut app = DesktopApp::new(url, server);
    event_loop
        .run_app(&mut app)
        .context("event loop terminated unexpectedly")?;

    Ok(())
}

struct DesktopApp {
    url: String,
    window: Option<Window>,
    webview: Option<WebView>,
    server: Option<AppServer>,
}

impl DesktopApp {
    fn new(url: String, server: AppServer) -> Self {
        Self {
            url,
            window: None,
            webview: None,
            server: Some(server),
        }
    }

    fn init_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        if self.window.is_some() {
            return Ok(());
        }

        let attrs = Window::default_attributes()
            .with_title("Prompt Builder")
            .with_inner_size(LogicalSize::new(960.0, 640.0));

        let window = event_loop
            .create_window(attrs)
            .context("failed to create main window")?;

        let webview = WebViewBuilder::new()
            .with_url(&self.url)
            .build(&window)
            .context("failed to build webview")?;

        info!(url = %self.url, "main window opened");
        self.webview = Some(webview);
        self.window = Some(window);
        Ok(())
    }

    fn shutdown_server(&mut self) {
        if let Some(mut server) = self.server.take() {
            server.stop();
        }
    }
}

impl ApplicationHandler for DesktopApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(err) = self.init_window(event_loop) {
            error!("{err:#}");
            self.shutdown_server();
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let WindowEvent::CloseRequested = event {
            self.shutdown_server();
            event_loop.exit();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown_server();
    }
}

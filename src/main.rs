mod ui;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("starting roomrug {}", env!("CARGO_PKG_VERSION"));
    ui::run_studio_window();
}

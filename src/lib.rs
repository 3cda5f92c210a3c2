pub mod adapters;
pub mod core;
pub mod runtime;

pub fn run() {
    env_logger::init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(runtime::cli::run()) {
        log::error!("skinchat stopped: {e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

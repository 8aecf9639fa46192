mod cli;
mod config;
mod counter;
mod error;
mod exercise;
mod form;
mod gate;
mod geometry;
mod landmark;
mod logging;
mod posture;
mod session;
mod stream;

fn main() -> anyhow::Result<()> {
    logging::init();
    cli::run()
}

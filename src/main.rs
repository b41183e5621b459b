use std::path::PathBuf;

use anyhow::Result;
use grove::{App, Config};
use winit::event_loop::EventLoop;

fn main() -> Result<()> {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

  let config_path = std::env::args_os().nth(1).map(PathBuf::from);
  let config = Config::discover(config_path.as_deref())?;

  let event_loop = EventLoop::new()?;
  let mut app = App::new(&event_loop, config)?;
  Ok(event_loop.run_app(&mut app)?)
}

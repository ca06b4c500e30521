use once_cell::sync::Lazy;
use std::sync::Mutex;

use crate::{config::CliArgs, logger::Logger};

pub struct GlobalData {
    pub logger: Mutex<Logger>,
    pub config: Mutex<CliArgs>,
    pub quiet: Mutex<bool>,
}

pub static G: Lazy<GlobalData> = Lazy::new(|| GlobalData {
    logger: Mutex::new(Logger::default()),
    config: Mutex::new(CliArgs::default()),
    quiet: Mutex::new(false),
});

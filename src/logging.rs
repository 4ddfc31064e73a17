//! Logging backend which writes to a file next to our settings (or to stderr if the game didn't
//! give us a directory).

use chrono::Local;
use log::{Level, LevelFilter, Metadata, Record};
use once_cell::sync::OnceCell;
use std::{
    fs::File,
    io::Write,
    path::PathBuf,
    sync::{mpsc, Mutex},
};

use crate::shield;

pub const LOG_FILE_NAME: &str = "nightmods.log";

struct Message {
    module: String,
    level: Level,
    string: String,
    time: String,
}

impl Message {
    fn write_to(&self, out: &mut dyn Write) {
        let level_name = match self.level {
            Level::Error => "error",
            Level::Warn => "warning",
            Level::Info => "info",
            Level::Debug | Level::Trace => "debug",
        };

        //      [date time] [module] [level] Text
        let _ = out.write_fmt(format_args!(
            "[{}] [{}] [{}] {}\n",
            self.time, self.module, level_name, self.string
        ));
    }
}

pub struct Logger;

impl Logger {
    fn commit(&self, record: &Record) {
        let module_path = match record.module_path() {
            Some(path) => path,
            None => return,
        };

        let message = Message {
            module: module_path
                .split("::")
                .last()
                .unwrap_or("unknown")
                .to_string(),
            level: record.level(),
            string: format!("{}", record.args()),
            time: Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        };

        if let Some(sender) = MSG_SENDER.get() {
            if let Ok(sender) = sender.lock() {
                // The writer thread only stops if the process is going down.
                let _ = sender.send(message);
            }
        }
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target().starts_with(env!("CARGO_CRATE_NAME"))
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.commit(record);
        }
    }

    fn flush(&self) {}
}

static LOGGER: Logger = Logger;
static MSG_SENDER: OnceCell<Mutex<mpsc::Sender<Message>>> = OnceCell::new();

fn install_panic_hook() {
    // The game may have a hook of its own, so keep it and only step in front of it.
    let previous = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown location".to_string());

        // `shielded` catches and reports these itself. They must not reach the game's hook or
        // cost a backtrace on every frame.
        if shield::is_shielding() {
            shield::note_panic_location(location);
            return;
        }

        let message = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "no message".to_string());

        let backtrace = std::backtrace::Backtrace::force_capture();

        log::error!("panic at {location}: {message}\n{backtrace}");

        previous(info);
    }));
}

fn open_output(log_path: Option<PathBuf>) -> Box<dyn Write + Send> {
    if let Some(path) = log_path {
        match File::create(&path) {
            Ok(file) => return Box::new(file),
            Err(err) => eprintln!("unable to create log file {}: {err}", path.display()),
        }
    }

    Box::new(std::io::stderr())
}

/// Installs the logger. Only the first call does anything, so both entry points can call this.
pub fn init(log_path: Option<PathBuf>) {
    let mut first = false;

    MSG_SENDER.get_or_init(|| {
        first = true;

        let (sender, receiver) = mpsc::channel::<Message>();
        let mut out = open_output(log_path);

        // Write on a background thread so that logging from the render hook doesn't stall
        // the frame.
        let spawned = std::thread::Builder::new()
            .name("nightmods_log".to_string())
            .spawn(move || {
                while let Ok(msg) = receiver.recv() {
                    msg.write_to(&mut out);
                    let _ = out.flush();
                }
            });

        if let Err(err) = spawned {
            eprintln!("unable to start log writer: {err}");
        }

        Mutex::new(sender)
    });

    if !first {
        return;
    }

    install_panic_hook();

    let max_level = if cfg!(feature = "debug") {
        LevelFilter::Trace
    } else {
        LevelFilter::Info
    };

    // Fails if the game already installed its own logger, in which case we log through that.
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(max_level);
    }
}

mod cli;
mod modes;

use quill_core::core::interrupt;

fn main() {
    let _ = dotenvy::dotenv();

    if let Err(e) = cli::run() {
        if e.downcast_ref::<interrupt::InterruptedError>().is_some() {
            std::process::exit(130);
        }
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

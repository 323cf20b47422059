use kship::cli::error::KshipError;
use kship::cli::run;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    #[cfg(windows)]
    let _ = enable_ansi_support::enable_ansi_support();

    if let Err(e) = run() {
        if e.downcast_ref::<KshipError>().is_some() {
            // User error
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        eprintln!("Internal error: {}", e);
        // Show error chain if available
        let mut chain = e.chain().skip(1).peekable();
        if chain.peek().is_some() {
            eprintln!("\nCaused by:");
            for (indent, err) in chain.enumerate() {
                eprintln!("{:indent$}  {}", "", err, indent = indent + 1);
            }
        }
        std::process::exit(2);
    }
}

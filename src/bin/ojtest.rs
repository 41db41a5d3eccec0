fn main() {
    match ojtest::cli::run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(ojtest::cli::EXIT_STARTUP_FAILURE);
        }
    }
}

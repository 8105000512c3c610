fn main() {
    if let Err(e) = symdex_cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

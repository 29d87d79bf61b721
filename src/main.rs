fn main() {
    if let Err(e) = citytalk::cli::main() {
        eprintln!("❌ Error: {e}");
        std::process::exit(1);
    }
}

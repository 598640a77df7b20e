fn main() {
    if let Err(err) = csv_keymerge::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

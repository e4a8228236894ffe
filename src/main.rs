fn main() {
    if let Err(e) = slice_submit::run() {
        eprintln!("Error: {e:?}");
        std::process::exit(1);
    }
}

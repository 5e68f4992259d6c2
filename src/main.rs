fn main() {
    if let Err(err) = reqflow::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

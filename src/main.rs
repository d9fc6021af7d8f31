fn main() {
    if let Err(err) = noterlink_lib::run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

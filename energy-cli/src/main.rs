fn main() {
    if let Err(err) = power_energy::app::run() {
        eprintln!("energy report failed: {err}");
        std::process::exit(1);
    }
}

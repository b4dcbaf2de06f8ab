fn main() {
    if let Err(err) = lbq::run() {
        lbq::ui::error(&err.to_string());
        std::process::exit(1);
    }
}

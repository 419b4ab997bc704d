fn main() {
    std::process::exit(gtm_client::app::startup::run());
}

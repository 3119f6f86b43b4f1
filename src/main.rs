fn main() -> std::process::ExitCode {
    picam_lib::run()
}

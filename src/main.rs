fn main() -> std::process::ExitCode {
    finprod_lib::run()
}

fn main() {
    std::process::exit(parley::cli::main());
}

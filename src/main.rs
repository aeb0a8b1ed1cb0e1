fn main() {
    #[cfg(feature = "cli")]
    deltax::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("deltax: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}

use flipstat_core::report::PipelineKind;

fn main() {
    flipstat_cli::init_logging();
    std::process::exit(flipstat_cli::run(PipelineKind::Minmax));
}

fn main() {
    if let Err(err) = a11y_inspector::cli::run() {
        a11y_inspector::ui::eprintln_error(&err);
        std::process::exit(a11y_inspector::exit::exit_code(&err));
    }
}

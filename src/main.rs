fn main() {
    survey_sort::cli::run();
}

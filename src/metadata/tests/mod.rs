mod tests_matching;
mod tests_parser;

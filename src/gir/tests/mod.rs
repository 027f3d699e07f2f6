mod tests_walker;

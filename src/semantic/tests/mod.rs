mod tests_initialization;
mod tests_validation;

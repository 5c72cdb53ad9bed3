mod tests_decisions;
mod tests_first;

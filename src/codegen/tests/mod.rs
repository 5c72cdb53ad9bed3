mod tests_emission;

#[cfg(test)]
mod common;





#[cfg(test)]
mod conflict_tests;

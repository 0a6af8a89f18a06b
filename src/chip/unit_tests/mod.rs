#[cfg(test)]
mod common;
#[cfg(test)]
mod group_tests;
#[cfg(test)]
mod interconnect_tests;
#[cfg(test)]
mod report_tests;

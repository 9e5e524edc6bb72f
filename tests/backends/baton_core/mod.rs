#![cfg(test)]

mod cancellation;
mod cleanup;
mod failures;
mod limits;
mod ordering;
mod support;

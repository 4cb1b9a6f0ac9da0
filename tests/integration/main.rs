//! Integration tests for tickerwatch

mod e2e_test;
mod feed_test;
mod market_test;

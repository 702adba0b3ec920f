
mod metrics;

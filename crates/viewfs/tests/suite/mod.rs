mod concurrency;
mod physical;

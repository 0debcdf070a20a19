mod concurrency;
mod scenarios;
mod support;

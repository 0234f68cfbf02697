mod chunked_provision_test;
mod spawn_retry_test;

mod metrics_test;

mod adam_test;

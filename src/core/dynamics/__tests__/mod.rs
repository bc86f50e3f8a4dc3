mod euler_test;

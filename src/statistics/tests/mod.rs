mod statistics_service_tests;

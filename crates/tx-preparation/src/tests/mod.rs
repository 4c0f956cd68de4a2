mod preparation_flow_test;

mod scenario_sweep_test;

mod greedy_test;
mod metrics_test;
mod model_test;
mod pareto_test;

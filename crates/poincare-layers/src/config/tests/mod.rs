mod graph_tests;
mod hyperplanes_tests;
mod pooling_tests;

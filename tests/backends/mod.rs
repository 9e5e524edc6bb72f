mod baton_core;

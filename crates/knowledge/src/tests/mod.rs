mod pipeline_scenarios;

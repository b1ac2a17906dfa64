mod custom_values;
